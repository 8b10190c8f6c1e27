pub mod enums;
pub mod money;
pub mod order_transitions;
pub mod orders;
