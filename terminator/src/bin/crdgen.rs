//! Print the Sidecar CustomResourceDefinition.
//!
//! Usage: `terminator-crdgen | kubectl apply -f -`

fn main() -> anyhow::Result<()> {
    print!("{}", terminator::crd::crd_yaml()?);
    Ok(())
}
