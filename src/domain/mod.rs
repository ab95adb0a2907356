// Domain layer - Core types shared by planning and synthesis

pub mod model;
