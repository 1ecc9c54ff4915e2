pub mod forms;
pub mod requirements;
pub mod validation;
