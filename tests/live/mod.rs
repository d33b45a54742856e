mod broadcast_tests;
mod session_tests;
mod websocket_tests;
