pub mod contact_message;
pub mod customer;
