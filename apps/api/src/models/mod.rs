pub mod pack_set;
