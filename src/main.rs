fn main() -> anyhow::Result<()> {
    orbit_ngin::app::run()
}
