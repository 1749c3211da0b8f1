pub mod stage;
pub mod record;
pub mod movement;

pub use stage::*;
pub use record::*;
pub use movement::*;
