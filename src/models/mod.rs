pub mod delivery_person;
pub mod event;
pub mod location;
pub mod order;
