//! CRD Generator
//!
//! Prints the Repo CustomResourceDefinition as YAML.
//!
//! ```bash
//! cargo run -p crds --bin crdgen > config/crd/repo.yaml
//! ```

use crds::Repo;
use kube::CustomResourceExt;

fn main() -> Result<(), serde_yaml::Error> {
    print!("{}", serde_yaml::to_string(&Repo::crd())?);
    Ok(())
}
