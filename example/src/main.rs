// example/src/main.rs

mod generated;

use kproto::{CodecError, Message, WireConfig};

// Bring the generated types into scope:
use generated::login::{AuthMsg, Login1Msg, LoginService};

/// Accepts every login whose password is not empty.
struct Gatekeeper {
    next_token: u32,
}

impl LoginService for Gatekeeper {
    type Error = String;

    fn login(&mut self, req: &Login1Msg) -> Result<AuthMsg, Self::Error> {
        if req.password.is_empty() {
            return Err(format!("user {} sent no password", req.user_name));
        }
        self.next_token += 1;
        Ok(AuthMsg { test: self.next_token })
    }
}

fn sample_login() -> Login1Msg {
    Login1Msg {
        id: 42,
        user_name: "ferris".to_string(),
        password: "hunter2".to_string(),
        auth: AuthMsg { test: 7 },
        last_ip: "10.0.0.1".to_string(),
        auths: vec![AuthMsg { test: 1 }, AuthMsg { test: 2 }],
        tags: vec!["admin".to_string(), "beta".to_string()],
        scores: vec![0.5, 1.25],
    }
}

fn main() -> Result<(), CodecError> {
    let login = sample_login();

    // Encode into a buffer sized for the worst case.
    let mut buf = [0u8; Login1Msg::MAX_SIZE];
    let len = login.encode(&mut buf)?;
    println!("Login1Msg (id {}) encoded to {} of {} bytes", Login1Msg::ID, len, Login1Msg::MAX_SIZE);

    let decoded = Login1Msg::decode(&buf[..len])?;
    println!("decoded user = {}, tags = {:?}", decoded.user_name, decoded.tags);
    assert_eq!(decoded, login);

    // The same message with a big endian wire.
    let len = login.encode_with(&mut buf, WireConfig::big_endian())?;
    let decoded = Login1Msg::decode_with(&buf[..len], WireConfig::big_endian())?;
    assert_eq!(decoded, login);

    let mut service = Gatekeeper { next_token: 100 };
    match service.login(&decoded) {
        Ok(reply) => println!("login accepted, token = {}", reply.test),
        Err(err) => println!("login rejected: {}", err),
    }

    Ok(())
}
