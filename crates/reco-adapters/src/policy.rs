use serde_json::{json, Value};

pub const SERVICE_PRINCIPAL: &str = "personalize.amazonaws.com";
const POLICY_ID: &str = "PersonalizeS3BucketAccessPolicy";

/// Política de bucket que permite al servicio leer los objetos de entrada.
pub fn bucket_read_policy(bucket: &str) -> Value {
    policy(bucket, &["s3:GetObject", "s3:ListBucket"])
}

/// Lectura y escritura de objetos: destinos de los jobs batch.
pub fn bucket_read_write_policy(bucket: &str) -> Value {
    policy(bucket, &["s3:GetObject", "s3:PutObject", "s3:ListBucket"])
}

fn policy(bucket: &str, actions: &[&str]) -> Value {
    json!({
        "Version": "2012-10-17",
        "Id": POLICY_ID,
        "Statement": [{
            "Sid": POLICY_ID,
            "Effect": "Allow",
            "Principal": { "Service": SERVICE_PRINCIPAL },
            "Action": actions,
            "Resource": [format!("arn:aws:s3:::{bucket}"), format!("arn:aws:s3:::{bucket}/*")]
        }]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grants_object_and_bucket_level_read() {
        let policy = bucket_read_policy("my-data");
        let stmt = &policy["Statement"][0];
        assert_eq!(stmt["Principal"]["Service"], SERVICE_PRINCIPAL);
        assert_eq!(stmt["Resource"][0], "arn:aws:s3:::my-data");
        assert_eq!(stmt["Resource"][1], "arn:aws:s3:::my-data/*");
        assert_eq!(stmt["Action"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn read_write_adds_put_object() {
        let policy = bucket_read_write_policy("results");
        let actions = policy["Statement"][0]["Action"].as_array().cloned().unwrap_or_default();
        assert!(actions.contains(&json!("s3:PutObject")));
        assert_eq!(policy["Statement"][0]["Resource"][1], "arn:aws:s3:::results/*");
    }
}
