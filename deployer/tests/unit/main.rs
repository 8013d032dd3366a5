//! Unit test suite

mod test_fsm;
mod test_projector;
mod test_run;
