fn main() {
    std::process::exit(corpusql_cli_lib::main());
}
