pub mod argument;
pub mod perftest;
pub mod plan;
pub mod topology;
