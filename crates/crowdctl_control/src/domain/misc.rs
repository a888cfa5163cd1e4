use crowdctl_wire::constants::{
    GLOBAL_OBJECT_ID, VAR_ADD_STIMULUS_INFOS, VAR_ADD_TARGET_CHANGER, VAR_DISSEMINATION,
    VAR_GET_ALL_STIMULUS_INFOS, VAR_REMOVE_TARGET_CHANGER,
};
use crowdctl_wire::{TypeTag, TypedValue};

use super::{expect, Domain, DomainHandle};
use crate::channel::Channel;
use crate::error::ControlResult;

/// Typed access to target changers, stimuli and dissemination.
///
/// Payloads are JSON documents built by the caller. They travel as
/// typed strings.
#[derive(Debug)]
pub struct MiscApi<'a> {
    handle: DomainHandle<'a>,
}

impl<'a> MiscApi<'a> {
    /// Creates the accessor.
    pub fn new(channel: &'a mut Channel) -> Self {
        Self {
            handle: channel.domain(Domain::MISC),
        }
    }

    /// The untyped handle underneath.
    pub fn handle(&mut self) -> &mut DomainHandle<'a> {
        &mut self.handle
    }

    /// Adds a target changer described by `definition`.
    ///
    /// # Errors
    ///
    /// Propagates peer and wire errors.
    pub fn create_target_changer(&mut self, definition: &str) -> ControlResult<()> {
        self.handle
            .set(VAR_ADD_TARGET_CHANGER, GLOBAL_OBJECT_ID, &TypedValue::from(definition))
    }

    /// Removes the target changer `id`.
    ///
    /// # Errors
    ///
    /// Propagates peer and wire errors.
    pub fn remove_target_changer(&mut self, id: &str) -> ControlResult<()> {
        self.handle
            .set(VAR_REMOVE_TARGET_CHANGER, id, &TypedValue::Compound(Vec::new()))
    }

    /// Adds stimulus infos.
    ///
    /// # Errors
    ///
    /// Propagates peer and wire errors.
    pub fn add_stimulus_infos(&mut self, infos: &str) -> ControlResult<()> {
        self.handle
            .set(VAR_ADD_STIMULUS_INFOS, GLOBAL_OBJECT_ID, &TypedValue::from(infos))
    }

    /// Every stimulus info known to the simulation.
    ///
    /// # Errors
    ///
    /// Propagates peer and wire errors.
    pub fn all_stimulus_infos(&mut self) -> ControlResult<String> {
        let value = self.handle.get(VAR_GET_ALL_STIMULUS_INFOS, GLOBAL_OBJECT_ID)?;
        expect(value, TypeTag::String, |v| match v {
            TypedValue::String(infos) => Some(infos),
            _ => None,
        })
    }

    /// Sends a control command to be disseminated among persons.
    ///
    /// # Errors
    ///
    /// Propagates peer and wire errors.
    pub fn send_dissemination(&mut self, command: &str) -> ControlResult<()> {
        self.handle
            .set(VAR_DISSEMINATION, GLOBAL_OBJECT_ID, &TypedValue::from(command))
    }
}
