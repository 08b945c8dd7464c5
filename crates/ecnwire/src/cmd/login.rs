use ecnwire_client::ClientConfig;
use tracing::info;

use crate::cmd::{parse_duration, LoginArgs};
use crate::exit::{client_error, CliResult, FAILURE, SUCCESS};
use crate::output::{print_exchange, OutputFormat};

pub fn run(args: LoginArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;

    let mut client = ecnwire_client::connect(&args.addr, ClientConfig::with_timeout(timeout))
        .map_err(|err| client_error("connect failed", err))?;
    info!(addr = %args.addr, username = %args.username, "sending login request");

    let exchange = client
        .login(&args.username, &args.password)
        .map_err(|err| client_error("login failed", err))?;

    let session = *client.session();
    let token = (!session.is_zero()).then_some(session);
    print_exchange(
        "login",
        &exchange,
        token.as_ref().map(|t| t.as_bytes().as_slice()),
        format,
    );
    if !exchange.is_success() {
        return Ok(FAILURE);
    }

    if args.logout && token.is_some() {
        let exchange = client
            .logout()
            .map_err(|err| client_error("logout failed", err))?;
        print_exchange("logout", &exchange, None, format);
        if !exchange.is_success() {
            return Ok(FAILURE);
        }
    }

    Ok(SUCCESS)
}
