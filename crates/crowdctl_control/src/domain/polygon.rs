use crowdctl_wire::constants::{GLOBAL_OBJECT_ID, VAR_CENTROID, VAR_ID_LIST, VAR_SHAPE};
use crowdctl_wire::{TypeTag, TypedValue};

use super::{expect, Domain, DomainHandle};
use crate::channel::Channel;
use crate::error::ControlResult;

/// Typed access to topography polygons (targets, sources, obstacles).
#[derive(Debug)]
pub struct PolygonApi<'a> {
    handle: DomainHandle<'a>,
}

impl<'a> PolygonApi<'a> {
    /// Creates the accessor.
    pub fn new(channel: &'a mut Channel) -> Self {
        Self {
            handle: channel.domain(Domain::POLYGON),
        }
    }

    /// The untyped handle underneath.
    pub fn handle(&mut self) -> &mut DomainHandle<'a> {
        &mut self.handle
    }

    /// Ids of every polygon.
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

    /// Outline of `polygon`.
    ///
    /// # Errors
    ///
    /// Propagates peer and wire errors.
    pub fn shape(&mut self, polygon: &str) -> ControlResult<Vec<(f64, f64)>> {
        let value = self.handle.get(VAR_SHAPE, polygon)?;
        expect(value, TypeTag::Polygon, |v| match v {
            TypedValue::Polygon(points) => Some(points),
            _ => None,
        })
    }

    /// Center of mass of `polygon`.
    ///
    /// # Errors
    ///
    /// Propagates peer and wire errors.
    pub fn centroid(&mut self, polygon: &str) -> ControlResult<(f64, f64)> {
        let value = self.handle.get(VAR_CENTROID, polygon)?;
        expect(value, TypeTag::Position2D, |v| v.as_position())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{get_response, ScriptedStream};
    use crate::transport::FrameTransport;
    use crowdctl_wire::constants::CMD_GET_POLYGON_VARIABLE;

    #[test]
    fn test_shape_and_centroid() {
        let square = vec![(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)];
        let (stream, _) = ScriptedStream::new(vec![
            get_response(CMD_GET_POLYGON_VARIABLE, VAR_SHAPE, "12", &TypedValue::Polygon(square.clone())),
            get_response(
                CMD_GET_POLYGON_VARIABLE,
                VAR_CENTROID,
                "12",
                &TypedValue::Position2D { x: 1.0, y: 1.0 },
            ),
        ]);
        let mut channel = Channel::new(FrameTransport::new(stream));
        let mut polygons = PolygonApi::new(&mut channel);

        assert_eq!(polygons.shape("12").unwrap(), square);
        assert_eq!(polygons.centroid("12").unwrap(), (1.0, 1.0));
    }
}
