pub mod builder;
pub mod building;
pub mod city;
pub mod mandator;
