pub mod graph;
pub mod model;
pub mod predicates;
pub mod service;
