#![allow(dead_code)]

use pip_tokens::{KeyPair, KeyStore};

/// 2048-bit PS384 key pair in the shape the signing service is provisioned with.
pub const PUBLIC_JWK: &str = r#"{"kty":"RSA","alg":"PS384","n":"vRJS-stmaRwFsgmbtugnZLPcGz-80gnbYdCuhju4CwbuGeQk2JI1Qkivcy50TFgO5z7jz38ighp_Hr2kvOOEWvo_l_J_Ix3mpw9RBDZF6ocNRYuoS9R_SoeMgrx-VQWC1VSqqbbT7A5526an4Kmsrnes1MyroK052CT4QYPUT_wbICmv85uqEuyD7q6X-HpHvHBTiTRQtcfxHJUrXebInCU6cg1VtcJsDoYczRVL1i9_7z5POMyjAx1v-sSR_16r6H1NLghR6fpUwm-HmbKSPwqrN5NA8Q-94spj4zp_4PoAEQi2NRnjJSQQxPBeH8RRAfdO7HwnhDm7hXXgocTj_w","e":"AQAB","key_ops":["verify"],"ext":true}"#;

pub const PRIVATE_JWK: &str = r#"{"kty":"RSA","alg":"PS384","n":"vRJS-stmaRwFsgmbtugnZLPcGz-80gnbYdCuhju4CwbuGeQk2JI1Qkivcy50TFgO5z7jz38ighp_Hr2kvOOEWvo_l_J_Ix3mpw9RBDZF6ocNRYuoS9R_SoeMgrx-VQWC1VSqqbbT7A5526an4Kmsrnes1MyroK052CT4QYPUT_wbICmv85uqEuyD7q6X-HpHvHBTiTRQtcfxHJUrXebInCU6cg1VtcJsDoYczRVL1i9_7z5POMyjAx1v-sSR_16r6H1NLghR6fpUwm-HmbKSPwqrN5NA8Q-94spj4zp_4PoAEQi2NRnjJSQQxPBeH8RRAfdO7HwnhDm7hXXgocTj_w","e":"AQAB","d":"bc3vjSGFh3OzxxMXcOFgx3ZBVT3t_hmlZChawzB5kUXkD_tUfsZi0ez-oCkRd6kIdroqeb4_H0oeG49N1jlYC7IcLrWxqoZaBxm5FnYiorLuPT5_bhKqHnGcY-zufZgmxJhYSRoZ95TspmkiRDKmS-jK4gc_gaA44NOPrhTOv-gNcI5u15vAr0Ei2KWD4v86f-F1u44xy2-kEOtoHBr6PrFhp7cPKrO0byNIwfIElXSa3Ws347cpPeawU33XnNtMmNz0rdZMsjbZravILIjXgwhTV1hg9WIg6l6Dq6U6iEI8owoW-EqSr3oVy5zRnR2lGKj4IzSU-g4BWWyunJFY0Q","p":"1FDqhuHh3zoepa22olf4SLYdey-D9iimynt1n4vyijIdaoOnuWEFdth9AlCm6u3EYQYX9HkQQxsM6bjo1Bwh8rQzeBkj34mS5b2thor1cGxgXjYVC7DPW2rf06VkFB5ELl9yPVFhuYGPw5ekuXPs7ZTi2pW71U3Akgo3PmHV2tc","q":"4_kTrIJjxWDp42Fn53jRDrj5cDsnM1j_7XYBj68lbdQKz0jucHxLe1mCt8C-DT1LCsXWaBnBwzIqdWMapJz6PzTGk6AIwdI371_65poWwaC7b65Jd5CNnG_V3EPUx1GnWGoeYO3Fa3rayeE9bfm6K0Suzhp-l89DIr7qSff-Axk","dp":"ByWKH2wvDDKKoY0NXr2TT-9BYsogqQKJSruJJAuz6E7ziohP9v97DZsP6ioI1FOYjqOD3ujMUVXxw1REEg-4XNEQAnTmLjoVRcJyutqmlFgxjjpHzxLuh-c7DYa9raevJ9hyofnBTls8GZtbIhry2LRwRmdP4UgyuTe60FC-wBU","dq":"c8lgCrA3CFrOsCQa59_fHoEof64rnNLJOcxDwryMYBngW6OJJyyaEc5GrBmC7aqB4LjWywy58vAZzIFHWPA50bx2VyhjCj5BFp1DC7ibckC2smRtAAM1SY0rq7Hv8kQwoKFVSJm7OXmugfaagq7htXQu7JNcVLJ6QL2CtYr1QpE","qi":"dUR-9jxBR70IqvWvhM3hZMi5n02HD1kUTp-MG04l0txGrGOB6_1VgFWxlyDWQfeSDLocWoc4W0VZX638BmhkJKdpAId7LbwprRzZopgzH6F1PAxzXPFBFwDU90mQ2fZ8j4rgQMJshvvf207Tqxm0tMzmnwr06_W7mqxTiiisJmk","key_ops":["sign"],"ext":true}"#;

pub const SEED: &str = "0000000000000000000000000000000000000000000000000000000000000001";
pub const CONTEXT: &str = "per-client-pip-key";

pub fn fixed_key_pair() -> KeyPair {
    KeyPair::from_jwk(PRIVATE_JWK, PUBLIC_JWK).unwrap()
}

// 1024-bit keys keep debug-mode key generation fast.
pub fn small_key_pair() -> KeyPair {
    KeyPair::generate(&mut rand::thread_rng(), 1024).unwrap()
}

pub fn store_with(pairs: Vec<(u64, KeyPair)>) -> KeyStore {
    let mut store = KeyStore::new();
    for (epoch, kp) in pairs {
        store.insert(epoch, kp).unwrap();
    }
    store
}
