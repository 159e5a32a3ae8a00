//! # Transform Graph Model
//!
//! Plain data describing the graph handed to the transform engine:
//! coordinate spaces are the nodes, transform edges connect them.
//! These types cross every boundary: catalog ↔ classifier ↔ builder ↔ registry.
//!
//! Design rule: no filesystem scanning and no registry state here.
//! Landmark CSV reading is the one I/O helper and lives next to its type.

pub mod space;
pub mod edge;
pub mod payload;
pub mod affine;
pub mod landmarks;
pub mod function;

pub use space::{CoordinateSpace, Unit, AxisUnits};
pub use edge::{
    TransformEdge, EdgeType, EdgeKey, Direction,
    DEFAULT_WEIGHT, UTILITY_WEIGHT, ALIAS_WEIGHT,
};
pub use payload::{TransformPayload, ArtifactFamily, FieldTransform, ElastixTransform};
pub use affine::AffineMatrix;
pub use landmarks::{LandmarkPairs, LandmarkColumns, load_landmarks};
pub use function::{
    CoordinateFunction, AcquisitionCorrection, CorrectionDirection,
    AxisReflection, StackFlip, Axis, reflect, flip_stack,
};
