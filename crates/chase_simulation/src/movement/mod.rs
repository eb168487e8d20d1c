//! Movement domain: input snapshot, горизонтальная и вертикальная модели

pub mod horizontal;
pub mod input;
pub mod vertical;

pub use horizontal::update_horizontal_velocity;
pub use input::{consume_single_shot_input, MovementInput};
pub use vertical::{sanitize_velocity, update_vertical_velocity, MovementState, VerticalStep};
