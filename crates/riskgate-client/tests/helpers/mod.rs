pub mod mock_api_server;
