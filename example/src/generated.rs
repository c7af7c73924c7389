// Code generated by kprotoc from example/schema/login.kproto. DO NOT EDIT.

pub mod login {
    use kproto::{ByteReader, ByteWriter, CodecError, Message};

    pub const AUTH_MSG_ID: u16 = 101;
    pub const LOGIN1_MSG_ID: u16 = 102;

    #[derive(Debug, Clone, PartialEq, Default)]
    pub struct AuthMsg {
        pub test: u32,
    }

    impl Message for AuthMsg {
        const ID: u16 = AUTH_MSG_ID;
        const MAX_SIZE: usize = 4;

        fn write(&self, w: &mut ByteWriter<'_>) -> Result<(), CodecError> {
            w.write_u32(self.test)?;
            Ok(())
        }

        fn read(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
            Ok(Self {
                test: r.read_u32()?,
            })
        }
    }

    #[derive(Debug, Clone, PartialEq, Default)]
    pub struct Login1Msg {
        pub id: u64,
        pub user_name: String,
        pub password: String,
        pub auth: AuthMsg,
        pub last_ip: String,
        pub auths: Vec<AuthMsg>,
        pub tags: Vec<String>,
        pub scores: Vec<f32>,
    }

    impl Message for Login1Msg {
        const ID: u16 = LOGIN1_MSG_ID;
        const MAX_SIZE: usize = 219;

        fn write(&self, w: &mut ByteWriter<'_>) -> Result<(), CodecError> {
            w.write_u64(self.id)?;
            w.write_string(&self.user_name)?;
            w.write_string(&self.password)?;
            self.auth.write(w)?;
            w.write_string(&self.last_ip)?;
            w.write_length(self.auths.len())?;
            for item in &self.auths {
                item.write(w)?;
            }
            w.write_string_array(&self.tags)?;
            w.write_f32_array(&self.scores)?;
            Ok(())
        }

        fn read(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
            Ok(Self {
                id: r.read_u64()?,
                user_name: r.read_string()?,
                password: r.read_string()?,
                auth: AuthMsg::read(r)?,
                last_ip: r.read_string()?,
                auths: {
                    let len = r.read_length()?;
                    let mut items = Vec::with_capacity(len.min(r.remaining()));
                    for _ in 0..len {
                        items.push(AuthMsg::read(r)?);
                    }
                    items
                },
                tags: r.read_string_array()?,
                scores: r.read_f32_array()?,
            })
        }
    }

    pub trait LoginService {
        type Error;

        fn login(&mut self, req: &Login1Msg) -> Result<AuthMsg, Self::Error>;
    }
}
