use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub const ROOT_KDL: &str = r#"
project "acme-infra"

variables {
    fi "acme"
}

environment "prod" {
    env-subdomain "prod"
    zone "corp.internal" id="{{ ZONE_ID }}"
    operations-cidr "10.250.0.0/24"
    internal-cidr "10.0.0.0/8"
    region "primary" name="us-east-1" vpc-cidr="10.20.0.0/16" kms-key="alias/prod-use1" {
        vpc "spoke" {
            subnets "public" "subnet-pub"
            subnets "compute" "subnet-a" "subnet-b"
            subnets "data" "subnet-db"
        }
    }
    region "recovery" name="us-west-2" vpc-cidr="10.30.0.0/16" kms-key="alias/prod-usw2" {
        vpc "spoke" {
            subnets "compute" "subnet-dr-a"
        }
    }
    shared {
        instance-role "role/app"
        key-pair "ops-key"
    }
}
"#;

pub const CORE_CLUSTER: &str = r#"
cluster "{{ fi }}-core" {
    fi-name "{{ fi }}"
    tier "web" {
        count 2
        ami "ami-web"
        recovery-ami-ids "ami-web-dr"
        instance-type "m5.large"
    }
}
"#;

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    /// tierplan.kdl、.env、clusters/core.kdl を持つ標準プロジェクト
    pub fn standard() -> Self {
        let project = Self::new();
        project.write_root_kdl(ROOT_KDL);
        project.write_file(".env", "ZONE_ID=Z0PRIVATE\n");
        project.write_cluster("core", CORE_CLUSTER);
        project
    }

    pub fn write_root_kdl(&self, content: &str) {
        self.write_file("tierplan.kdl", content);
    }

    pub fn write_cluster(&self, name: &str, content: &str) {
        let dir = self.root.path().join("clusters");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("{}.kdl", name)), content).unwrap();
    }

    pub fn write_file(&self, name: &str, content: &str) {
        fs::write(self.root.path().join(name), content).unwrap();
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }
}
