fn main() -> anyhow::Result<()> {
    poolwatch::cli::run()
}
