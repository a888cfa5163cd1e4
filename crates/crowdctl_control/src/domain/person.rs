use crowdctl_wire::constants::{
    GLOBAL_OBJECT_ID, VAR_ADD, VAR_COUNT, VAR_HAS_NEXT_TARGET, VAR_ID_LIST,
    VAR_INFORMATION_ITEM, VAR_NEXT_TARGET_LIST_INDEX, VAR_POSITION, VAR_SPEED, VAR_TARGET_LIST,
};
use crowdctl_wire::{TypeTag, TypedValue};

use super::{expect, Domain, DomainHandle};
use crate::channel::Channel;
use crate::error::ControlResult;

/// Typed access to pedestrians.
#[derive(Debug)]
pub struct PersonApi<'a> {
    handle: DomainHandle<'a>,
}

impl<'a> PersonApi<'a> {
    /// Creates the accessor.
    pub fn new(channel: &'a mut Channel) -> Self {
        Self {
            handle: channel.domain(Domain::PERSON),
        }
    }

    /// The untyped handle underneath.
    pub fn handle(&mut self) -> &mut DomainHandle<'a> {
        &mut self.handle
    }

    /// Ids of every person in the simulation.
    ///
    /// # Errors
    ///
    /// Propagates peer and wire errors.
    pub fn id_list(&mut self) -> ControlResult<Vec<String>> {
        let value = self.handle.get(VAR_ID_LIST, GLOBAL_OBJECT_ID)?;
        expect(value, TypeTag::StringList, |v| match v {
            TypedValue::StringList(ids) => Some(ids),
            _ => None,
        })
    }

    /// Number of persons in the simulation.
    ///
    /// # Errors
    ///
    /// Propagates peer and wire errors.
    pub fn count(&mut self) -> ControlResult<i32> {
        let value = self.handle.get(VAR_COUNT, GLOBAL_OBJECT_ID)?;
        expect(value, TypeTag::Integer, |v| v.as_i32())
    }

    /// 2D position of `person`.
    ///
    /// # Errors
    ///
    /// Propagates peer and wire errors.
    pub fn position(&mut self, person: &str) -> ControlResult<(f64, f64)> {
        let value = self.handle.get(VAR_POSITION, person)?;
        expect(value, TypeTag::Position2D, |v| v.as_position())
    }

    /// Free-flow speed of `person`.
    ///
    /// # Errors
    ///
    /// Propagates peer and wire errors.
    pub fn speed(&mut self, person: &str) -> ControlResult<f64> {
        let value = self.handle.get(VAR_SPEED, person)?;
        expect(value, TypeTag::Double, |v| v.as_f64())
    }

    /// Sets the free-flow speed of `person`.
    ///
    /// # Errors
    ///
    /// Propagates peer and wire errors.
    pub fn set_speed(&mut self, person: &str, speed: f64) -> ControlResult<()> {
        self.handle.set(VAR_SPEED, person, &TypedValue::Double(speed))
    }

    /// Target ids `person` walks to, in order.
    ///
    /// # Errors
    ///
    /// Propagates peer and wire errors.
    pub fn target_list(&mut self, person: &str) -> ControlResult<Vec<String>> {
        let value = self.handle.get(VAR_TARGET_LIST, person)?;
        expect(value, TypeTag::StringList, |v| match v {
            TypedValue::StringList(targets) => Some(targets),
            _ => None,
        })
    }

    /// Replaces the target list of `person`.
    ///
    /// # Errors
    ///
    /// Propagates peer and wire errors.
    pub fn set_target_list(&mut self, person: &str, targets: &[String]) -> ControlResult<()> {
        self.handle
            .set(VAR_TARGET_LIST, person, &TypedValue::StringList(targets.to_vec()))
    }

    /// Index of the next target in the target list of `person`.
    ///
    /// # Errors
    ///
    /// Propagates peer and wire errors.
    pub fn next_target_list_index(&mut self, person: &str) -> ControlResult<i32> {
        let value = self.handle.get(VAR_NEXT_TARGET_LIST_INDEX, person)?;
        expect(value, TypeTag::Integer, |v| v.as_i32())
    }

    /// Moves the target pointer of `person`.
    ///
    /// # Errors
    ///
    /// Propagates peer and wire errors.
    pub fn set_next_target_list_index(&mut self, person: &str, index: i32) -> ControlResult<()> {
        self.handle
            .set(VAR_NEXT_TARGET_LIST_INDEX, person, &TypedValue::Integer(index))
    }

    /// Returns true if `person` has a target left to walk to.
    ///
    /// # Errors
    ///
    /// Propagates peer and wire errors.
    pub fn has_next_target(&mut self, person: &str) -> ControlResult<bool> {
        let value = self.handle.get(VAR_HAS_NEXT_TARGET, person)?;
        expect(value, TypeTag::Integer, |v| v.as_i32()).map(|flag| flag != 0)
    }

    /// Hands an information item to `person`.
    ///
    /// # Errors
    ///
    /// Propagates peer and wire errors.
    pub fn set_information(&mut self, person: &str, item: &str) -> ControlResult<()> {
        self.handle
            .set(VAR_INFORMATION_ITEM, person, &TypedValue::from(item))
    }

    /// Spawns a person described by `description`.
    ///
    /// # Errors
    ///
    /// Propagates peer and wire errors.
    pub fn create_new(&mut self, description: &str) -> ControlResult<()> {
        self.handle
            .set(VAR_ADD, GLOBAL_OBJECT_ID, &TypedValue::from(description))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ControlError;
    use crate::test_support::{ack, get_response, ScriptedStream};
    use crate::transport::FrameTransport;
    use crowdctl_wire::constants::{CMD_GET_PERSON_VARIABLE, CMD_SET_PERSON_VARIABLE};
    use crowdctl_wire::WireError;

    fn channel(replies: Vec<Vec<u8>>) -> (Channel, crate::test_support::SentLog) {
        let (stream, sent) = ScriptedStream::new(replies);
        (Channel::new(FrameTransport::new(stream)), sent)
    }

    #[test]
    fn test_id_list() {
        let ids = TypedValue::StringList(vec!["1".into(), "4".into()]);
        let (mut channel, _) = channel(vec![get_response(CMD_GET_PERSON_VARIABLE, VAR_ID_LIST, "", &ids)]);

        let got = PersonApi::new(&mut channel).id_list().unwrap();
        assert_eq!(got, vec!["1".to_owned(), "4".to_owned()]);
    }

    #[test]
    fn test_wrong_type_is_wire_error() {
        let reply = get_response(CMD_GET_PERSON_VARIABLE, VAR_SPEED, "3", &TypedValue::from("fast"));
        let (mut channel, _) = channel(vec![reply]);

        let err = PersonApi::new(&mut channel).speed("3").unwrap_err();
        assert!(matches!(
            err,
            ControlError::Wire(WireError::UnexpectedType { expected: 0x0B, found: 0x0C })
        ));
    }

    #[test]
    fn test_set_target_list_encoding() {
        let (mut channel, sent) = channel(vec![ack(CMD_SET_PERSON_VARIABLE)]);

        PersonApi::new(&mut channel)
            .set_target_list("5", &["2".into(), "3".into()])
            .unwrap();

        // header(4) len id var objLen(4) obj(1) tag count(4) ...
        let written = sent.lock().clone();
        assert_eq!(written[5], CMD_SET_PERSON_VARIABLE);
        assert_eq!(written[6], VAR_TARGET_LIST);
        assert_eq!(written[11], b'5');
        assert_eq!(written[12], 0x0E);
        assert_eq!(&written[13..17], &2i32.to_be_bytes());
    }

    #[test]
    fn test_has_next_target() {
        let reply = get_response(CMD_GET_PERSON_VARIABLE, VAR_HAS_NEXT_TARGET, "1", &TypedValue::Integer(1));
        let (mut channel, _) = channel(vec![reply]);

        assert!(PersonApi::new(&mut channel).has_next_target("1").unwrap());
    }
}
