//! Binary persistence of generated CFGs.
//!
//! Only available with the `cache` feature. The encoding is `bincode`'s
//! default configuration and carries no version header; a cache written
//! by a different build of this crate must not be decoded.

use crate::generate::ProgramCfg;

pub fn encode(cfg: &ProgramCfg) -> Result<Vec<u8>, bincode::Error> {
    bincode::serialize(cfg)
}

pub fn decode(bytes: &[u8]) -> Result<ProgramCfg, bincode::Error> {
    bincode::deserialize(bytes)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests {
    use pretty_assertions::assert_eq;

    use kite_ir::{BinaryOp, ProgramBuilder, Type};

    use super::{decode, encode};
    use crate::frame::StackFrameHandler;
    use crate::generate::generate_program;

    #[test]
    fn program_survives_the_cache() {
        let mut b = ProgramBuilder::new();
        b.function("f", &[("n", Type::Int)], Type::Bool, |b, params| {
            let n = b.var(params[0]);
            let zero = b.int(0);
            b.binary(BinaryOp::Gt, n, zero)
        });
        let unit = b.finish();
        let handlers = StackFrameHandler::build_all(&unit);
        let cfg = generate_program(&unit, &handlers).unwrap();

        let bytes = encode(&cfg).unwrap();
        assert_eq!(decode(&bytes).unwrap(), cfg);
    }

    #[test]
    fn truncated_input_is_an_error() {
        assert!(decode(&[1, 2, 3]).is_err());
    }
}
