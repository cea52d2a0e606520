mod listen_config;
pub use listen_config::ListenConfig;

mod server_socket;
pub use server_socket::ServerSocket;
