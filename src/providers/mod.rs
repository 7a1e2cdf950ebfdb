//! Card-data provider implementations

pub mod scryfall;

pub use scryfall::ScryfallProvider;
