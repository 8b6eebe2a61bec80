use std::process::Command;

#[test]
fn gateway_exits_nonzero_on_bad_configuration() {
    let status = Command::new(env!("CARGO_BIN_EXE_submux"))
        .arg("gateway")
        .env("SUBMUX__SERVER__MAX_CONNECTIONS", "0")
        .status()
        .expect("run submux");
    assert!(!status.success());
}

#[test]
fn client_exits_nonzero_when_gateway_is_unreachable() {
    // Bind and drop a listener to get a port nobody listens on.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();

    let status = Command::new(env!("CARGO_BIN_EXE_submux"))
        .args(["client", "--url", &format!("ws://127.0.0.1:{port}")])
        .status()
        .expect("run submux");
    assert!(!status.success());
}
