use crowdctl_wire::constants::{
    GLOBAL_OBJECT_ID, VAR_ARRIVED_PEDESTRIAN_IDS, VAR_COORD_REF, VAR_DELTA_T,
    VAR_DEPARTED_PEDESTRIAN_IDS, VAR_NET_BOUNDING_BOX, VAR_OUTPUT_DIR, VAR_TIME,
};
use crowdctl_wire::{TypeTag, TypedValue};

use super::{expect, Domain, DomainHandle};
use crate::channel::Channel;
use crate::error::ControlResult;

/// Typed access to simulation globals. Every variable lives on the
/// global object `""`.
#[derive(Debug)]
pub struct SimulationApi<'a> {
    handle: DomainHandle<'a>,
}

impl<'a> SimulationApi<'a> {
    /// Creates the accessor.
    pub fn new(channel: &'a mut Channel) -> Self {
        Self {
            handle: channel.domain(Domain::SIMULATION),
        }
    }

    /// The untyped handle underneath.
    pub fn handle(&mut self) -> &mut DomainHandle<'a> {
        &mut self.handle
    }

    /// Current simulation time in seconds.
    ///
    /// # Errors
    ///
    /// Propagates peer and wire errors.
    pub fn time(&mut self) -> ControlResult<f64> {
        self.double(VAR_TIME)
    }

    /// Length of one simulation step in seconds.
    ///
    /// # Errors
    ///
    /// Propagates peer and wire errors.
    pub fn delta_t(&mut self) -> ControlResult<f64> {
        self.double(VAR_DELTA_T)
    }

    /// Lower-left and upper-right corner of the topography.
    ///
    /// # Errors
    ///
    /// Propagates peer and wire errors.
    pub fn network_bound(&mut self) -> ControlResult<Vec<(f64, f64)>> {
        let value = self.handle.get(VAR_NET_BOUNDING_BOX, GLOBAL_OBJECT_ID)?;
        expect(value, TypeTag::Polygon, |v| match v {
            TypedValue::Polygon(points) => Some(points),
            _ => None,
        })
    }

    /// Directory the simulation writes its output to.
    ///
    /// # Errors
    ///
    /// Propagates peer and wire errors.
    pub fn output_directory(&mut self) -> ControlResult<String> {
        self.string(VAR_OUTPUT_DIR)
    }

    /// Coordinate reference system of the topography.
    ///
    /// # Errors
    ///
    /// Propagates peer and wire errors.
    pub fn coordinate_reference(&mut self) -> ControlResult<String> {
        self.string(VAR_COORD_REF)
    }

    /// Persons that entered during the last step.
    ///
    /// # Errors
    ///
    /// Propagates peer and wire errors.
    pub fn departed_ids(&mut self) -> ControlResult<Vec<String>> {
        self.string_list(VAR_DEPARTED_PEDESTRIAN_IDS)
    }

    /// Persons that left during the last step.
    ///
    /// # Errors
    ///
    /// Propagates peer and wire errors.
    pub fn arrived_ids(&mut self) -> ControlResult<Vec<String>> {
        self.string_list(VAR_ARRIVED_PEDESTRIAN_IDS)
    }

    fn double(&mut self, variable: u8) -> ControlResult<f64> {
        let value = self.handle.get(variable, GLOBAL_OBJECT_ID)?;
        expect(value, TypeTag::Double, |v| v.as_f64())
    }

    fn string(&mut self, variable: u8) -> ControlResult<String> {
        let value = self.handle.get(variable, GLOBAL_OBJECT_ID)?;
        expect(value, TypeTag::String, |v| match v {
            TypedValue::String(s) => Some(s),
            _ => None,
        })
    }

    fn string_list(&mut self, variable: u8) -> ControlResult<Vec<String>> {
        let value = self.handle.get(variable, GLOBAL_OBJECT_ID)?;
        expect(value, TypeTag::StringList, |v| match v {
            TypedValue::StringList(ids) => Some(ids),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{get_response, ScriptedStream};
    use crate::transport::FrameTransport;
    use crowdctl_wire::constants::CMD_GET_SIM_VARIABLE;

    #[test]
    fn test_time_and_bounds() {
        let (stream, _) = ScriptedStream::new(vec![
            get_response(CMD_GET_SIM_VARIABLE, VAR_TIME, "", &TypedValue::Double(12.4)),
            get_response(
                CMD_GET_SIM_VARIABLE,
                VAR_NET_BOUNDING_BOX,
                "",
                &TypedValue::Polygon(vec![(0.0, 0.0), (40.0, 25.0)]),
            ),
        ]);
        let mut channel = Channel::new(FrameTransport::new(stream));
        let mut simulation = SimulationApi::new(&mut channel);

        assert!((simulation.time().unwrap() - 12.4).abs() < f64::EPSILON);
        assert_eq!(simulation.network_bound().unwrap(), vec![(0.0, 0.0), (40.0, 25.0)]);
    }

    #[test]
    fn test_departed_ids() {
        let ids = TypedValue::StringList(vec!["8".into()]);
        let (stream, _) = ScriptedStream::new(vec![get_response(
            CMD_GET_SIM_VARIABLE,
            VAR_DEPARTED_PEDESTRIAN_IDS,
            "",
            &ids,
        )]);
        let mut channel = Channel::new(FrameTransport::new(stream));

        assert_eq!(
            SimulationApi::new(&mut channel).departed_ids().unwrap(),
            vec!["8".to_owned()]
        );
    }
}
