/// GET /: plain-text banner so a browser or uptime check sees the server is up.
pub async fn index_handler() -> &'static str {
    "Hello! The Pinterest Automation Server is running."
}
