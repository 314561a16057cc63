pub mod keep_alive;
