pub mod history_service;
