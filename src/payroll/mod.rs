pub mod unifier;
