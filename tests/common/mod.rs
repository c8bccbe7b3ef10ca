#![allow(unused_imports)]
#![allow(dead_code)]

mod fixtures;
pub use fixtures::*;

pub use fundusmap::{
    Accumulator, Category, CategorySet, HeatmapPipeline, HeatmapRun, LandmarkRecord, Side,
};
