//! # Protocol Constants
//!
//! Command identifiers, variable identifiers and type tags shared by both
//! ends of the control connection.
//!
//! ## Command Id Layout
//!
//! ```text
//! 0x8_ context subscribe      0x9_ context subscribe response
//! 0xA_ get variable          0xB_ get variable response
//! 0xC_ set variable
//! 0xD_ subscribe variable    0xE_ subscribe variable response
//! ```
//!
//! Every response id is its command id plus [`RESPONSE_OFFSET`].

// ============================================================================
// GENERIC COMMANDS
// ============================================================================

/// Query the protocol version of the peer.
pub const CMD_GETVERSION: u8 = 0x00;
/// Load a simulation with the given arguments.
pub const CMD_LOAD: u8 = 0x01;
/// Advance the simulation up to a given time.
pub const CMD_SIMSTEP: u8 = 0x02;
/// Set the client order for multi-client setups.
pub const CMD_SETORDER: u8 = 0x03;
/// Send a scenario file to the simulation.
pub const CMD_FILE_SEND: u8 = 0x75;
/// Query the current subscription state without stepping.
pub const CMD_SIM_STATE: u8 = 0x76;
/// Controller handshake command used in server mode.
pub const CMD_CONTROLLER: u8 = 0x78;
/// Close the connection.
pub const CMD_CLOSE: u8 = 0x7F;

/// Offset between a command id and its response id.
pub const RESPONSE_OFFSET: u8 = 0x10;

// ============================================================================
// DOMAIN COMMANDS
// ============================================================================

/// Get a person variable.
pub const CMD_GET_PERSON_VARIABLE: u8 = 0xAE;
/// Response to [`CMD_GET_PERSON_VARIABLE`].
pub const RESPONSE_GET_PERSON_VARIABLE: u8 = 0xBE;
/// Set a person variable.
pub const CMD_SET_PERSON_VARIABLE: u8 = 0xCE;
/// Subscribe to person variables.
pub const CMD_SUBSCRIBE_PERSON_VARIABLE: u8 = 0xDE;
/// Response to [`CMD_SUBSCRIBE_PERSON_VARIABLE`].
pub const RESPONSE_SUBSCRIBE_PERSON_VARIABLE: u8 = 0xEE;
/// Context subscription around a person.
pub const CMD_SUBSCRIBE_PERSON_CONTEXT: u8 = 0x8E;
/// Response to [`CMD_SUBSCRIBE_PERSON_CONTEXT`].
pub const RESPONSE_SUBSCRIBE_PERSON_CONTEXT: u8 = 0x9E;

/// Get a miscellaneous-object variable.
pub const CMD_GET_MISC_VARIABLE: u8 = 0xAC;
/// Response to [`CMD_GET_MISC_VARIABLE`].
pub const RESPONSE_GET_MISC_VARIABLE: u8 = 0xBC;
/// Set a miscellaneous-object variable.
pub const CMD_SET_MISC_VARIABLE: u8 = 0xCC;
/// Subscribe to miscellaneous-object variables.
pub const CMD_SUBSCRIBE_MISC_VARIABLE: u8 = 0xDC;
/// Response to [`CMD_SUBSCRIBE_MISC_VARIABLE`].
pub const RESPONSE_SUBSCRIBE_MISC_VARIABLE: u8 = 0xEC;
/// Context subscription around a miscellaneous object.
pub const CMD_SUBSCRIBE_MISC_CONTEXT: u8 = 0x8C;
/// Response to [`CMD_SUBSCRIBE_MISC_CONTEXT`].
pub const RESPONSE_SUBSCRIBE_MISC_CONTEXT: u8 = 0x9C;

/// Get a simulation variable.
pub const CMD_GET_SIM_VARIABLE: u8 = 0xAB;
/// Response to [`CMD_GET_SIM_VARIABLE`].
pub const RESPONSE_GET_SIM_VARIABLE: u8 = 0xBB;
/// Set a simulation variable.
pub const CMD_SET_SIM_VARIABLE: u8 = 0xCB;
/// Subscribe to simulation variables.
pub const CMD_SUBSCRIBE_SIM_VARIABLE: u8 = 0xDB;
/// Response to [`CMD_SUBSCRIBE_SIM_VARIABLE`].
pub const RESPONSE_SUBSCRIBE_SIM_VARIABLE: u8 = 0xEB;
/// Context subscription around a simulation object.
pub const CMD_SUBSCRIBE_SIM_CONTEXT: u8 = 0x8B;
/// Response to [`CMD_SUBSCRIBE_SIM_CONTEXT`].
pub const RESPONSE_SUBSCRIBE_SIM_CONTEXT: u8 = 0x9B;

/// Get a polygon variable.
pub const CMD_GET_POLYGON_VARIABLE: u8 = 0xA8;
/// Response to [`CMD_GET_POLYGON_VARIABLE`].
pub const RESPONSE_GET_POLYGON_VARIABLE: u8 = 0xB8;
/// Set a polygon variable.
pub const CMD_SET_POLYGON_VARIABLE: u8 = 0xC8;
/// Subscribe to polygon variables.
pub const CMD_SUBSCRIBE_POLYGON_VARIABLE: u8 = 0xD8;
/// Response to [`CMD_SUBSCRIBE_POLYGON_VARIABLE`].
pub const RESPONSE_SUBSCRIBE_POLYGON_VARIABLE: u8 = 0xE8;
/// Context subscription around a polygon.
pub const CMD_SUBSCRIBE_POLYGON_CONTEXT: u8 = 0x88;
/// Response to [`CMD_SUBSCRIBE_POLYGON_CONTEXT`].
pub const RESPONSE_SUBSCRIBE_POLYGON_CONTEXT: u8 = 0x98;

/// Get a control-channel variable.
pub const CMD_GET_CONTROL_VARIABLE: u8 = 0xAD;
/// Response to [`CMD_GET_CONTROL_VARIABLE`].
pub const RESPONSE_GET_CONTROL_VARIABLE: u8 = 0xBD;
/// Set a control-channel variable.
pub const CMD_SET_CONTROL_VARIABLE: u8 = 0xCD;
/// Subscribe to control-channel variables.
pub const CMD_SUBSCRIBE_CONTROL_VARIABLE: u8 = 0xDD;
/// Response to [`CMD_SUBSCRIBE_CONTROL_VARIABLE`].
pub const RESPONSE_SUBSCRIBE_CONTROL_VARIABLE: u8 = 0xED;
/// Context subscription on the control channel.
pub const CMD_SUBSCRIBE_CONTROL_CONTEXT: u8 = 0x8D;
/// Response to [`CMD_SUBSCRIBE_CONTROL_CONTEXT`].
pub const RESPONSE_SUBSCRIBE_CONTROL_CONTEXT: u8 = 0x9D;

// ============================================================================
// TYPE TAGS
// ============================================================================

/// Geographic position (lon, lat).
pub const POSITION_LON_LAT: u8 = 0x00;
/// Cartesian 2D position.
pub const POSITION_2D: u8 = 0x01;
/// Geographic position with altitude.
pub const POSITION_LON_LAT_ALT: u8 = 0x02;
/// Cartesian 3D position.
pub const POSITION_3D: u8 = 0x03;
/// Road-map position (road id, offset, lane).
pub const POSITION_ROADMAP: u8 = 0x04;
/// Polygon of 2D points.
pub const TYPE_POLYGON: u8 = 0x06;
/// Unsigned byte.
pub const TYPE_UBYTE: u8 = 0x07;
/// Signed byte.
pub const TYPE_BYTE: u8 = 0x08;
/// 32-bit signed integer.
pub const TYPE_INTEGER: u8 = 0x09;
/// 64-bit float.
pub const TYPE_DOUBLE: u8 = 0x0B;
/// Length-prefixed latin-1 string.
pub const TYPE_STRING: u8 = 0x0C;
/// Count-prefixed list of doubles.
pub const TYPE_DOUBLELIST: u8 = 0x0D;
/// Count-prefixed list of strings.
pub const TYPE_STRINGLIST: u8 = 0x0E;
/// Compound header: declares how many typed values follow.
pub const TYPE_COMPOUND: u8 = 0x0F;
/// RGBA color.
pub const TYPE_COLOR: u8 = 0x11;

// ============================================================================
// RESULT CODES
// ============================================================================

/// Command succeeded.
pub const RTYPE_OK: u8 = 0x00;
/// Command is not implemented by the peer.
pub const RTYPE_NOTIMPLEMENTED: u8 = 0x01;
/// Command failed.
pub const RTYPE_ERR: u8 = 0xFF;

// ============================================================================
// VARIABLES
// ============================================================================

/// List of all object ids of a domain.
pub const VAR_ID_LIST: u8 = 0x00;
/// Number of objects of a domain.
pub const VAR_COUNT: u8 = 0x01;
/// Controller handshake: initialization.
pub const VAR_INIT: u8 = 0x00;
/// Position (3D).
pub const VAR_POSITION3D: u8 = 0x39;
/// Speed.
pub const VAR_SPEED: u8 = 0x40;
/// Maximum speed.
pub const VAR_MAXSPEED: u8 = 0x41;
/// Position (2D).
pub const VAR_POSITION: u8 = 0x42;
/// Angle.
pub const VAR_ANGLE: u8 = 0x43;
/// Length.
pub const VAR_LENGTH: u8 = 0x44;
/// Color.
pub const VAR_COLOR: u8 = 0x45;
/// Width.
pub const VAR_WIDTH: u8 = 0x4D;
/// Shape.
pub const VAR_SHAPE: u8 = 0x4E;
/// Type id.
pub const VAR_TYPE: u8 = 0x4F;
/// Road id.
pub const VAR_ROAD_ID: u8 = 0x50;
/// Current simulation time.
pub const VAR_TIME: u8 = 0x66;
/// Ids of pedestrians that entered the simulation in the last step.
pub const VAR_DEPARTED_PEDESTRIAN_IDS: u8 = 0x74;
/// Ids of pedestrians that left the simulation in the last step.
pub const VAR_ARRIVED_PEDESTRIAN_IDS: u8 = 0x7A;
/// Simulation time step length.
pub const VAR_DELTA_T: u8 = 0x7B;
/// Bounding box of the simulated topography.
pub const VAR_NET_BOUNDING_BOX: u8 = 0x7C;
/// Add a new object.
pub const VAR_ADD: u8 = 0x80;
/// Position conversion.
pub const VAR_POSITION_CONVERSION: u8 = 0x82;
/// Centroid of a polygon.
pub const VAR_CENTROID: u8 = 0x30;
/// Add a target changer.
pub const VAR_ADD_TARGET_CHANGER: u8 = 0x31;
/// Remove a target changer.
pub const VAR_REMOVE_TARGET_CHANGER: u8 = 0x32;
/// Add stimulus infos.
pub const VAR_ADD_STIMULUS_INFOS: u8 = 0x33;
/// All stimulus infos.
pub const VAR_GET_ALL_STIMULUS_INFOS: u8 = 0x34;
/// Information dissemination command.
pub const VAR_DISSEMINATION: u8 = 0x35;
/// Output directory of the simulation run.
pub const VAR_OUTPUT_DIR: u8 = 0x36;
/// Coordinate reference.
pub const VAR_COORD_REF: u8 = 0x37;
/// Next free object id.
pub const VAR_NEXT_ID: u8 = 0xF9;
/// Information item of a person.
pub const VAR_INFORMATION_ITEM: u8 = 0xFA;
/// Velocity.
pub const VAR_VELOCITY: u8 = 0xFB;
/// Whether a person has a next target.
pub const VAR_HAS_NEXT_TARGET: u8 = 0xFC;
/// Index into a person's target list.
pub const VAR_NEXT_TARGET_LIST_INDEX: u8 = 0xFD;
/// Target list of a person.
pub const VAR_TARGET_LIST: u8 = 0xFE;

// ============================================================================
// SPECIAL VALUES
// ============================================================================

/// Sentinel double used for "no begin/end time" in subscriptions.
pub const INVALID_DOUBLE_VALUE: f64 = -1_073_741_824.0;

/// Time value meaning "run to completion, no further controller calls".
pub const RUN_TO_END: f64 = -1.0;

/// Peer message that marks the natural end of the simulation.
pub const SIMULATION_END_MESSAGE: &str = "Simulation end reached.";

/// Object id addressing the domain as a whole.
pub const GLOBAL_OBJECT_ID: &str = "";
