use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("blerpc {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: blerpc");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("BLERPC_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "features: peer={}, async={}, cli=true",
        cfg!(feature = "peer"),
        cfg!(feature = "async")
    );
    println!(
        "limits: default_mtu={}, att_overhead={}, max_gatt_value_len={}, min_payload={}",
        blerpc_link::DEFAULT_MTU,
        blerpc_link::ATT_OVERHEAD,
        blerpc_link::MAX_GATT_VALUE_LEN,
        blerpc_link::MIN_PAYLOAD
    );

    Ok(SUCCESS)
}
