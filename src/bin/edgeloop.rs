fn main() -> anyhow::Result<()> {
    edgeloop::cli::run()
}
