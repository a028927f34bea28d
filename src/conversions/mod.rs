pub mod up_axis;
