pub mod node_handler;
