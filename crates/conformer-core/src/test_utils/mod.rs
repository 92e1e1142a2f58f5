pub mod mock_action_container;
pub mod scripted_docker;
