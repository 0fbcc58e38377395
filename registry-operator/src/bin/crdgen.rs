use kube::core::CustomResourceExt;
use registry_operator::crd::registry::Registry;

fn main() {
    let crd = Registry::crd();
    let yaml = serde_yaml::to_string(&crd).expect("serialize CRD to YAML");
    println!("{}", yaml);
}
