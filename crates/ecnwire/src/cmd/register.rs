use ecnwire_client::ClientConfig;
use ecnwire_frame::{RegisterRequest, PUBLIC_KEY_SIZE};
use tracing::info;

use crate::cmd::{parse_duration, RegisterArgs};
use crate::exit::{client_error, encode_error, io_error, CliResult, FAILURE, SUCCESS};
use crate::output::{print_exchange, OutputFormat};

/// Fill byte for the placeholder key used when none is supplied.
const DEFAULT_KEY_BYTE: u8 = 0x01;

pub fn run(args: RegisterArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let public_key = resolve_public_key(&args)?;

    // Validate the fields before opening a connection.
    RegisterRequest::new(&args.username, &args.password, &public_key)
        .map_err(|err| encode_error("invalid register request", err))?;

    let mut client = ecnwire_client::connect(&args.addr, ClientConfig::with_timeout(timeout))
        .map_err(|err| client_error("connect failed", err))?;
    info!(addr = %args.addr, username = %args.username, "sending register request");

    let exchange = client
        .register(&args.username, &args.password, &public_key)
        .map_err(|err| client_error("register failed", err))?;
    print_exchange("register", &exchange, None, format);

    Ok(if exchange.is_success() { SUCCESS } else { FAILURE })
}

fn resolve_public_key(args: &RegisterArgs) -> CliResult<Vec<u8>> {
    if let Some(path) = &args.public_key_file {
        return std::fs::read(path)
            .map_err(|err| io_error(&format!("failed to read {}", path.display()), err));
    }
    Ok(vec![
        args.public_key_byte.unwrap_or(DEFAULT_KEY_BYTE);
        PUBLIC_KEY_SIZE
    ])
}
