fn main() -> anyhow::Result<()> {
    campus_bites_lib::run()
}
