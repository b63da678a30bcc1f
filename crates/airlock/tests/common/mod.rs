//! In-memory settlement shared by the site and runner tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use airlock::prelude::*;

pub const SURFACE: ContainerId = ContainerId(0);
pub const SETTLEMENT: ContainerId = ContainerId(1);

#[derive(Debug, Default)]
pub struct World {
    pub holders: HashMap<EntityId, ContainerId>,
    pub pumps_offline: bool,
    pub exchanges: Vec<VolumeId>,
    pub outer_door_openings: u32,
}

#[derive(Debug, Clone, Default)]
pub struct Settlement(pub Rc<RefCell<World>>);

impl Settlement {
    pub fn spawn(&self, id: u64, container: ContainerId) -> EntityRecord {
        let id = EntityId(id);
        self.0.borrow_mut().holders.insert(id, container);
        EntityRecord {
            id,
            location: if container == SURFACE {
                LocationState::Outside
            } else {
                LocationState::InSettlement
            },
            container,
        }
    }

    pub fn holder(&self, id: EntityId) -> Option<ContainerId> {
        self.0.borrow().holders.get(&id).copied()
    }

    pub fn endpoint(&self, id: u64, config: ChamberConfig) -> TransitEndpoint<Handles> {
        EndpointBuilder::new(EndpointId(id), format!("Hab {id}"), SETTLEMENT, SURFACE)
            .config(config)
            .transfers(self.clone())
            .atmosphere(self.clone())
            .thermal(self.clone())
            .build()
            .unwrap()
    }
}

impl ContainerTransferService for Settlement {
    fn transfer(
        &mut self,
        entity: EntityId,
        from: ContainerId,
        to: ContainerId,
    ) -> Result<(), TransferError> {
        let mut world = self.0.borrow_mut();
        match world.holders.get(&entity) {
            Some(holder) if *holder == from => {
                world.holders.insert(entity, to);
                Ok(())
            }
            _ => Err(TransferError::NotInContainer {
                entity,
                container: from,
            }),
        }
    }
}

impl AtmosphereManager for Settlement {
    fn release_air(&mut self, volume: VolumeId) -> Result<(), AtmosphereError> {
        let mut world = self.0.borrow_mut();
        if world.pumps_offline {
            return Err(AtmosphereError::Insufficient(volume));
        }
        world.exchanges.push(volume);
        Ok(())
    }

    fn recapture_air(&mut self, volume: VolumeId) -> Result<(), AtmosphereError> {
        let mut world = self.0.borrow_mut();
        if world.pumps_offline {
            return Err(AtmosphereError::Unavailable("pumps offline".into()));
        }
        world.exchanges.push(volume);
        Ok(())
    }
}

impl ThermalCoupling for Settlement {
    fn notify_outer_door_opened(&mut self) {
        self.0.borrow_mut().outer_door_openings += 1;
    }
}
