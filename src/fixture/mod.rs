//! Fixture descriptors and the catalogue that holds them.
mod catalogue;
mod descriptor;
mod validate;

pub use catalogue::{Catalogue, FixtureId, SharedCatalogue, shared};
pub use descriptor::{
    Action, ActionFade, ActionMode, ActionSize, ActionSpeed, Capabilities, Channel, ChannelRole,
    FixtureDescriptor, FixtureKind, Rotate, RotateSpeed, Setting, SettingValue, State, Toggle,
};
pub use validate::overlaps;
