mod cli;

use cli::Cli;

fn main() {
    let status = Cli::handle_command_line();
    std::process::exit(status.code());
}
