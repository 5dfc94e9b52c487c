pub mod icloudsort_core;
