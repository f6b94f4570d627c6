fn main() -> anyhow::Result<()> {
    vget_resolver_lib::run()
}
