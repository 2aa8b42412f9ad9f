pub mod ignore;
pub mod pattern;
pub mod staging;
