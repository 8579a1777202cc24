pub mod firecloud_client;
