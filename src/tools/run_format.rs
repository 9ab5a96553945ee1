use anyhow::Result;

use unibi::interp::{self, Params};
use unibi::Variant;

use crate::FormatArgs;

pub fn run_format(args: &FormatArgs) -> Result<()> {
    let mut params: Params = std::array::from_fn(|_| Variant::int(0));
    for (slot, value) in params.iter_mut().zip(args.params.iter()) {
        *slot = Variant::int(*value);
    }

    let mut buf = vec![0u8; 4096];
    let needed = interp::run(args.fmt.as_bytes(), &params, &mut buf);
    let n = needed.min(buf.len());
    print!("{}", String::from_utf8_lossy(&buf[..n]));
    if needed > buf.len() {
        eprintln!("\n(output truncated: {needed} bytes needed, buffer held {})", buf.len());
    }
    Ok(())
}
